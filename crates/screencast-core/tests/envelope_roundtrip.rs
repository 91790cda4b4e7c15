//! Integration tests for the screencast-core envelope codec.
//!
//! These tests go through the public API only and combine the codec with the
//! frame slot and conversation log the way the viewer does: decode a text
//! frame, then apply it to the domain state.

use screencast_core::{
    decode, encode, ConversationLog, Decoded, EncodedBytes, Envelope, FileTransferRecord, Frame,
    FrameSlot, Origin, SequenceCounter,
};

/// Encodes an envelope and decodes the resulting text, asserting the decode
/// produced a known envelope.
fn roundtrip(msg: &Envelope) -> Envelope {
    let text = encode(msg).expect("encode must succeed");
    match decode(&text).expect("decode must succeed") {
        Decoded::Envelope(env) => env,
        Decoded::Unrecognized { kind } => panic!("own envelope decoded as unknown kind {kind}"),
    }
}

#[test]
fn test_roundtrip_file_is_byte_exact() {
    // Arrange: every byte value, plus a length that needs padding
    let mut content: Vec<u8> = (0..=255u8).cycle().take(4097).collect();
    content.push(0);

    // Act
    let decoded = roundtrip(&Envelope::file("blob.bin", &content));

    // Assert
    match decoded {
        Envelope::FileTransfer {
            file_name,
            file_data,
        } => {
            assert_eq!(file_name, "blob.bin");
            assert_eq!(file_data.decode().unwrap(), content);
        }
        other => panic!("expected FileTransfer, got {other:?}"),
    }
}

#[test]
fn test_roundtrip_empty_file() {
    let decoded = roundtrip(&Envelope::file("empty.txt", b""));
    assert_eq!(decoded, Envelope::file("empty.txt", b""));
}

#[test]
fn test_roundtrip_chat_preserves_whitespace_and_unicode() {
    let msg = Envelope::chat("  hola, ¿qué tal? 👋\n");
    assert_eq!(roundtrip(&msg), msg);
}

#[test]
fn test_roundtrip_sequenced_frame_request() {
    let counter = SequenceCounter::new();
    counter.next();
    let msg = Envelope::frame_request(counter.next());
    assert_eq!(roundtrip(&msg), Envelope::FrameRequest { seq: Some(1) });
}

#[test]
fn test_report_pdf_received_by_peer_reconstructs_original_bytes() {
    // Arrange: the sending side encodes the file
    let original = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n1 0 obj\n<<>>\nendobj\n".to_vec();
    let wire = encode(&Envelope::file("report.pdf", &original)).unwrap();

    // Act: the receiving side decodes and records it
    let mut log = ConversationLog::new();
    if let Decoded::Envelope(Envelope::FileTransfer {
        file_name,
        file_data,
    }) = decode(&wire).unwrap()
    {
        log.push_file(FileTransferRecord::new(file_name, file_data, Origin::Remote));
    }

    // Assert
    let record = log.file(0).expect("file must be recorded");
    assert_eq!(record.file_name(), "report.pdf");
    assert_eq!(record.bytes().unwrap(), original);
    assert_eq!(record.origin(), Origin::Remote);
}

#[test]
fn test_out_of_order_image_replies_keep_newest_frame() {
    // Arrange: two pipelined requests, A then B
    let counter = SequenceCounter::new();
    let seq_a = counter.next();
    let seq_b = counter.next();
    let reply_a = format!(r#"{{"type":"image","data":"{}","seq":{seq_a}}}"#, EncodedBytes::from_bytes(b"A").as_str());
    let reply_b = format!(r#"{{"type":"image","data":"{}","seq":{seq_b}}}"#, EncodedBytes::from_bytes(b"B").as_str());

    // Act: B's reply is processed before A's
    let mut slot = FrameSlot::new();
    for raw in [reply_b, reply_a] {
        if let Decoded::Envelope(Envelope::FrameData { data, seq }) = decode(&raw).unwrap() {
            slot.offer(Frame::new(data, seq));
        }
    }

    // Assert
    assert_eq!(slot.current().unwrap().bytes().unwrap(), b"B");
}

/// Applies one received text frame to the viewer-side state.
fn apply(raw: &str, slot: &mut FrameSlot, log: &mut ConversationLog) {
    match decode(raw).expect("well-formed text") {
        Decoded::Envelope(Envelope::FrameData { data, seq }) => {
            slot.offer(Frame::new(data, seq));
        }
        Decoded::Envelope(Envelope::ChatMessage { data }) => {
            log.push_chat(data, Origin::Remote);
        }
        Decoded::Envelope(Envelope::FileTransfer {
            file_name,
            file_data,
        }) => {
            log.push_file(FileTransferRecord::new(file_name, file_data, Origin::Remote));
        }
        Decoded::Envelope(Envelope::FrameRequest { .. }) | Decoded::Unrecognized { .. } => {}
    }
}

#[test]
fn test_unknown_kind_leaves_state_untouched() {
    // Arrange: one frame and one chat already applied
    let mut slot = FrameSlot::new();
    let mut log = ConversationLog::new();
    apply(r#"{"type":"image","data":"AQID","seq":4}"#, &mut slot, &mut log);
    apply(r#"{"type":"message","data":"hi"}"#, &mut slot, &mut log);

    // Act
    apply(
        r#"{"type":"unknown_future_type","data":"x","seq":99}"#,
        &mut slot,
        &mut log,
    );

    // Assert: same frame, same log, and the next sequenced frame still fits
    assert_eq!(slot.current().unwrap().bytes().unwrap(), vec![1, 2, 3]);
    assert_eq!(slot.last_accepted_seq(), Some(4));
    assert_eq!(log.len(), 1);
    apply(r#"{"type":"image","data":"BA==","seq":5}"#, &mut slot, &mut log);
    assert_eq!(slot.current().unwrap().seq(), Some(5));
}
