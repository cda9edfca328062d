pub mod sms;
pub mod voice;
