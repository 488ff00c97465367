mod messenger;
mod settings;

pub use messenger::MessengerConfig;
pub use settings::Settings;
