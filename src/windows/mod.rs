pub use self::terminal::SystemDevice;

mod terminal;
