//! Gaze token transport between the tracking and animation sides

pub mod receiver;
pub mod sender;
pub mod token;

pub use receiver::TokenReceiver;
pub use sender::TokenSender;
