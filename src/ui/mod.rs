pub mod pipe;
pub mod util;

// Re-export the ergonomic helper so callers can use `crate::ui::track_id(...)`.
pub use util::track_id;
