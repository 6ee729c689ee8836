pub mod panel;
pub mod spinner;

pub use panel::{render_failed, render_loading};
pub use spinner::Spinner;
