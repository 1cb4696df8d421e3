mod portal_manager;

pub use portal_manager::PortalManager;
