use rand::Rng;
use reswire::constants::FRAME_LENGTH_FIELD_SIZE;
use reswire::frame::{FrameCodec, FrameDecodeError, FrameStreamDecoder};
use reswire::message::RequestEnvelope;
use serde_json::json;

fn login_request() -> RequestEnvelope {
    RequestEnvelope {
        kind: 1,
        data: json!({"username": "a", "password": "b"}),
    }
}

#[test]
fn encode_decode_roundtrip() {
    let request = login_request();

    let encoded = FrameCodec::encode(&request).expect("encode failed");
    let payload = &encoded[FRAME_LENGTH_FIELD_SIZE..];

    // The prefix is the big-endian byte length of the JSON that follows
    assert_eq!(
        encoded[..FRAME_LENGTH_FIELD_SIZE],
        (payload.len() as u32).to_be_bytes()
    );

    let decoded = FrameCodec::decode(payload).expect("decode failed");
    assert_eq!(decoded.kind, request.kind);
    assert_eq!(decoded.data, request.data);

    // Request frames carry no status fields; they decode to defaults
    assert!(!decoded.success);
    assert_eq!(decoded.message, "");
}

#[test]
fn decoder_handles_incomplete_input() {
    let encoded = FrameCodec::encode(&login_request()).expect("encode failed");

    // Split inside the length prefix, as in the worked login example
    let (head, tail) = encoded.split_at(2);

    let mut decoder = FrameStreamDecoder::new();

    {
        let payloads: Vec<_> = decoder.read_bytes(head).collect();
        assert_eq!(payloads.len(), 0); // Incomplete frame
    }

    let payloads: Vec<_> = decoder.read_bytes(tail).collect();
    assert_eq!(payloads.len(), 1); // Now complete

    let payload = payloads[0].as_ref().expect("expected valid payload");
    assert_eq!(payload, &encoded[4..]);

    let decoded = FrameCodec::decode(payload).expect("decode failed");
    assert_eq!(decoded.kind, 1);
    assert_eq!(decoded.data, json!({"username": "a", "password": "b"}));
}

#[test]
fn decoder_splits_coalesced_frames_in_one_pass() {
    let requests = [
        RequestEnvelope {
            kind: 1,
            data: json!({"username": "a"}),
        },
        RequestEnvelope {
            kind: 3,
            data: json!({"flight": "CA1234"}),
        },
        RequestEnvelope {
            kind: 5,
            data: json!({}),
        },
    ];

    let mut blob = vec![];
    for request in &requests {
        blob.extend(FrameCodec::encode(request).expect("encode failed"));
    }

    let mut decoder = FrameStreamDecoder::new();
    let payloads: Vec<_> = decoder
        .read_bytes(&blob)
        .map(|result| result.expect("expected valid payload"))
        .collect();

    assert_eq!(payloads.len(), 3);
    for (payload, request) in payloads.iter().zip(&requests) {
        let decoded = FrameCodec::decode(payload).expect("decode failed");
        assert_eq!(decoded.kind, request.kind);
        assert_eq!(decoded.data, request.data);
    }
}

#[test]
fn decoder_is_invariant_to_chunk_boundaries() {
    let requests = [
        RequestEnvelope {
            kind: 1,
            data: json!({"username": "a", "password": "b"}),
        },
        RequestEnvelope {
            kind: 2,
            data: json!({"seats": [1, 2, 3]}),
        },
        RequestEnvelope {
            kind: 7,
            data: json!({"note": "window seat please"}),
        },
    ];

    let mut blob = vec![];
    let mut expected = vec![];
    for request in &requests {
        let encoded = FrameCodec::encode(request).expect("encode failed");
        expected.push(encoded[FRAME_LENGTH_FIELD_SIZE..].to_vec());
        blob.extend(encoded);
    }

    // One byte at a time
    let mut decoder = FrameStreamDecoder::new();
    let mut payloads = vec![];
    for byte in &blob {
        for result in decoder.read_bytes(std::slice::from_ref(byte)) {
            payloads.push(result.expect("expected valid payload"));
        }
    }
    assert_eq!(payloads, expected);

    // Whole blob at once
    let mut decoder = FrameStreamDecoder::new();
    let payloads: Vec<_> = decoder
        .read_bytes(&blob)
        .map(|result| result.expect("expected valid payload"))
        .collect();
    assert_eq!(payloads, expected);

    // Random split boundaries
    let mut rng = rand::rng();
    for _ in 0..16 {
        let mut decoder = FrameStreamDecoder::new();
        let mut payloads = vec![];
        let mut rest = blob.as_slice();

        while !rest.is_empty() {
            let take = rng.random_range(1..=rest.len());
            let (head, tail) = rest.split_at(take);
            for result in decoder.read_bytes(head) {
                payloads.push(result.expect("expected valid payload"));
            }
            rest = tail;
        }

        assert_eq!(payloads, expected);
    }
}

#[test]
fn decoder_stalls_on_partial_body() {
    let encoded = FrameCodec::encode(&login_request()).expect("encode failed");

    let mut decoder = FrameStreamDecoder::new();

    // Full prefix, half the body
    let half = FRAME_LENGTH_FIELD_SIZE + (encoded.len() - FRAME_LENGTH_FIELD_SIZE) / 2;
    assert_eq!(decoder.read_bytes(&encoded[..half]).count(), 0);

    // Remainder completes the frame
    let payloads: Vec<_> = decoder.read_bytes(&encoded[half..]).collect();
    assert_eq!(payloads.len(), 1);
    assert_eq!(
        payloads[0].as_ref().expect("expected valid payload"),
        &encoded[FRAME_LENGTH_FIELD_SIZE..]
    );
}

#[test]
fn zero_length_frame_is_dropped_by_codec() {
    let mut decoder = FrameStreamDecoder::new();

    let payloads: Vec<_> = decoder.read_bytes(&[0, 0, 0, 0]).collect();
    assert_eq!(payloads.len(), 1);

    let payload = payloads[0].as_ref().expect("empty frame is legal framing");
    assert!(payload.is_empty());

    // The codec rejects it, non-fatally for the stream
    assert!(matches!(
        FrameCodec::decode(payload),
        Err(FrameDecodeError::MalformedJson(_))
    ));
}

#[test]
fn oversized_declared_length_is_rejected() {
    let mut decoder = FrameStreamDecoder::with_max_payload_size(64);

    let results: Vec<_> = decoder.read_bytes(&1024u32.to_be_bytes()).collect();
    assert_eq!(
        results,
        vec![Err(FrameDecodeError::PayloadTooLarge {
            declared: 1024,
            max: 64
        })]
    );

    // The decoder reset itself; a fresh well-formed frame under the cap
    // still decodes
    let encoded = FrameCodec::encode(&RequestEnvelope {
        kind: 4,
        data: json!({}),
    })
    .expect("encode failed");
    assert!(encoded.len() - FRAME_LENGTH_FIELD_SIZE <= 64);

    let payloads: Vec<_> = decoder.read_bytes(&encoded).collect();
    assert_eq!(payloads.len(), 1);
    assert_eq!(
        payloads[0].as_ref().expect("expected valid payload"),
        &encoded[FRAME_LENGTH_FIELD_SIZE..]
    );
}

#[test]
fn reset_discards_partial_frame() {
    let encoded = FrameCodec::encode(&login_request()).expect("encode failed");

    let mut decoder = FrameStreamDecoder::new();
    assert_eq!(decoder.read_bytes(&encoded[..encoded.len() - 1]).count(), 0);

    // Disconnect path: the stale partial frame must not be completed by
    // bytes from a new connection
    decoder.reset();

    let fresh = FrameCodec::encode(&RequestEnvelope {
        kind: 9,
        data: json!({"booking": 42}),
    })
    .expect("encode failed");

    let payloads: Vec<_> = decoder
        .read_bytes(&fresh)
        .map(|result| result.expect("expected valid payload"))
        .collect();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0], fresh[FRAME_LENGTH_FIELD_SIZE..]);
}

#[test]
fn non_object_payload_is_rejected() {
    assert_eq!(
        FrameCodec::decode(b"[1, 2, 3]"),
        Err(FrameDecodeError::NotAnObject)
    );
}

#[test]
fn missing_response_fields_decode_to_defaults() {
    let decoded = FrameCodec::decode(br#"{"type": 5}"#).expect("decode failed");

    assert_eq!(decoded.kind, 5);
    assert!(!decoded.success);
    assert_eq!(decoded.message, "");
    assert_eq!(decoded.data, json!({}));
}
