use fastgpt_api::{DeltaEvent, DeltaFrameDecoder};

#[test]
fn decoder_reconstructs_content_and_reasoning_fragments() {
    let payload = concat!(
        "data: {\"choices\":[{\"delta\":{\"reasoning_content\":\"thinking\"}}]}\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"answer\"}}]}\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"!\",\"reasoning_content\":\"…\"}}]}\n",
    );

    let events = DeltaFrameDecoder::parse_lines(payload);
    assert_eq!(
        events,
        vec![
            DeltaEvent::reasoning("thinking"),
            DeltaEvent::content("answer"),
            DeltaEvent {
                content: "!".to_string(),
                reasoning: "…".to_string(),
            },
        ]
    );
}

#[test]
fn decoder_is_chunk_boundary_independent() {
    let whole = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"one\"}}]}\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"two\"}}]}\n",
    );

    let mut split_decoder = DeltaFrameDecoder::default();
    let mut split_events =
        split_decoder.feed(b"data: {\"choices\":[{\"delta\":{\"content\":\"one\"}}]}\nda");
    split_events.extend(split_decoder.feed(b"ta: {\"choices\":[{\"delta\":{\"content\":\"two\"}}]}\n"));
    split_events.extend(split_decoder.finish());

    assert_eq!(split_events, DeltaFrameDecoder::parse_lines(whole));
    assert_eq!(split_events.len(), 2);
}

#[test]
fn done_sentinel_yields_no_events() {
    let payload = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\n",
        "data: [DONE]\n",
        "  data: [DONE]  \n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"y\"}}]}\n",
    );

    let events = DeltaFrameDecoder::parse_lines(payload);
    assert_eq!(events, vec![DeltaEvent::content("x"), DeltaEvent::content("y")]);
}

#[test]
fn malformed_lines_are_dropped_without_failing() {
    let payload = concat!(
        "data: {broken-json\n",
        "event: ping\n",
        ": comment line\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"kept\"}}]}\n",
        "data: {\"choices\":[]}\n",
        "data: {\"unrelated\":true}\n",
    );

    let events = DeltaFrameDecoder::parse_lines(payload);
    assert_eq!(events, vec![DeltaEvent::content("kept")]);
}

#[test]
fn double_encoded_payloads_are_unwrapped_once() {
    let inner = "{\"choices\":[{\"delta\":{\"content\":\"wrapped\"}}]}";
    let line = format!(
        "data: {}\n",
        serde_json::json!({ "data": inner })
    );

    let events = DeltaFrameDecoder::parse_lines(&line);
    assert_eq!(events, vec![DeltaEvent::content("wrapped")]);
}

#[test]
fn unparsable_inner_wrapper_falls_back_to_outer_object() {
    // Outer object carries its own delta; the inner string is not JSON.
    let line = "data: {\"data\":\"not json\",\"choices\":[{\"delta\":{\"content\":\"outer\"}}]}\n";
    let events = DeltaFrameDecoder::parse_lines(line);
    assert_eq!(events, vec![DeltaEvent::content("outer")]);
}

#[test]
fn wrapped_done_sentinel_is_discarded() {
    let events = DeltaFrameDecoder::parse_lines("data: {\"data\":\"[DONE]\"}\n");
    assert!(events.is_empty());
}

#[test]
fn empty_fragments_emit_no_event() {
    let payload = "data: {\"choices\":[{\"delta\":{\"content\":\"\",\"reasoning_content\":\"\"}}]}\n";
    assert!(DeltaFrameDecoder::parse_lines(payload).is_empty());
}

#[test]
fn leading_whitespace_before_prefix_is_tolerated() {
    let payload = "   data: {\"choices\":[{\"delta\":{\"content\":\"indented\"}}]}\n";
    let events = DeltaFrameDecoder::parse_lines(payload);
    assert_eq!(events, vec![DeltaEvent::content("indented")]);
}

#[test]
fn utf8_split_across_chunks_decodes_intact() {
    // Multibyte characters must survive a chunk boundary anywhere,
    // including mid-sequence.
    let line = "data: {\"choices\":[{\"delta\":{\"content\":\"好的\"}}]}\n".as_bytes();

    for split in 1..line.len() {
        let (head, tail) = line.split_at(split);
        let mut decoder = DeltaFrameDecoder::default();

        let mut events = decoder.feed(head);
        events.extend(decoder.feed(tail));
        events.extend(decoder.finish());

        assert_eq!(
            events,
            vec![DeltaEvent::content("好的")],
            "split at byte {split}"
        );
    }
}
