mod loopback_relay;

pub use loopback_relay::LoopbackRelay;
