mod gateway;
mod push;

pub use gateway::{
    ConnectOutcome, CreatedInstance, GatewayError, GatewayRestApi, IGatewayClient,
};
pub use push::{IPushSender, PushRelayApi};
