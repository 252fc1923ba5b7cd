//! WebSocket protocol core (RFC 6455): framing, masking, reassembly and the
//! opening handshake.

pub mod assembler;
pub mod frame;
pub mod handshake;
pub mod mask;
pub mod opcode;

pub use assembler::MessageAssembler;
pub use frame::{Frame, read_frame, write_frame};
pub use handshake::{
    ClientRequest, HandshakeRequest, HandshakeResponse, Headers, WS_GUID, acceptable,
    create_sec_accept,
};
pub use mask::{apply_mask, apply_mask_fast, unmask};
pub use opcode::OpCode;
