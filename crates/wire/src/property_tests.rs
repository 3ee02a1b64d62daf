// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Codec robustness properties.

use gf_core::JobId;
use proptest::prelude::*;

use crate::{decode, encode, Envelope, WorkerEnvelope, WorkerMsg};

proptest! {
    // arbitrary channel garbage must never panic the decoder
    #[test]
    fn decode_survives_arbitrary_input(input in ".{0,256}") {
        let _ = decode::<WorkerMsg>(&input);
    }

    // free-form worker text (newlines, quotes, unicode) survives the wire
    #[test]
    fn system_message_text_round_trips(text in ".{0,200}") {
        let envelope = Envelope::new(WorkerMsg::SystemMessage {
            job_id: JobId::from_string("job_01ARZ3NDEKTSV4RRFFQ69G5FAV"),
            text: text.clone(),
        });
        let back: WorkerEnvelope = decode(&encode(&envelope).unwrap()).unwrap();
        prop_assert_eq!(back.msg, envelope.msg);
    }
}
