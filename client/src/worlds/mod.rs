mod world_manager;

pub use world_manager::WorldManager;
