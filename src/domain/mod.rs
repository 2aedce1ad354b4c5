// Domain layer - point buffer, charts, windows and workspaces
pub mod chart;
pub mod point;
pub mod sample;
pub mod window;
pub mod workspace;
