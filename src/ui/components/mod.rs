mod command_input;
mod confirm;
mod form;
mod input;
mod interstitial;
mod key_result;
mod picker;
mod search_input;
mod toast;
mod welcome;

pub use command_input::{CommandEvent, CommandInput};
pub use confirm::Confirm;
pub use form::{Form, FormEvent, FormField};
pub use input::{InputResult, TextInput};
pub use interstitial::Interstitial;
pub use key_result::KeyResult;
pub use picker::{Picker, PickerEvent, PickerItem};
pub use search_input::{SearchEvent, SearchInput};
pub use toast::Toasts;
pub use welcome::render_welcome;
