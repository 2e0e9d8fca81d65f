pub mod mail;
pub mod new_subscriber;
pub mod subscriber_email;
