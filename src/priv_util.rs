use crate::sys::SystemDevice;
use crate::terminal::Terminal;

// Private trait used to prevent external crates from implementing extension traits
pub trait Private {}

impl Private for SystemDevice {}
impl Private for Terminal {}
