pub use self::terminal::SystemDevice;

pub mod ext;
mod terminal;
