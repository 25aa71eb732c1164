pub mod protocol;
pub mod receiver;
pub mod sender;
pub mod supervisor;
pub mod transport;

pub use protocol::{encode_error, encode_event, ControlMessage};
pub use receiver::{ClientReceiver, ReceiveStop, ReceiverReport};
pub use sender::{ClientSender, SendOutcome, SenderReport};
pub use supervisor::{SessionOutcome, SessionReport, SessionState, SessionSupervisor};
pub use transport::{
    memory_transport, ClientFrame, ClientSink, ClientSource, MemoryClient, MemorySink,
    MemorySource, ServerFrame,
};
