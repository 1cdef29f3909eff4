pub mod persona;
pub mod request;
pub mod variant;
