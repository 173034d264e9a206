//! Order execution backends implementing [`stratlab_core::traits::Broker`].

mod paper;

pub use paper::PaperBroker;
