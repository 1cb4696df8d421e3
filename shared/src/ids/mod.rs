pub mod error;
pub mod id_allocator;
pub mod id_space;
pub mod object_id;
