pub mod resources;
pub mod system;
