#![no_main]

//! Genome document fuzzer.
//!
//! Arbitrary bytes are fed to the JSON loader. Anything that loads must
//! evaluate without panicking, survive a save/load cycle unchanged and
//! leave the sequencer past every loaded id.

use cartneat::neat::{Sequencer, from_json, to_json};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let mut seq = Sequencer::new();
    let Ok(mut genome) = from_json(text, &mut seq) else {
        return;
    };

    if let Some(max) = genome.max_node_id() {
        assert!(seq.peek_node_id() > max || max == u32::MAX);
    }
    if let Some(max) = genome.max_connection_id() {
        assert!(seq.peek_connection_id() > max || max == u32::MAX);
    }

    let json = to_json(&genome).expect("loaded genome must serialize");
    let reloaded = from_json(&json, &mut Sequencer::new()).expect("saved genome must load");
    assert_eq!(reloaded.connection_count(), genome.connection_count());
    assert_eq!(reloaded.inputs(), genome.inputs());
    assert_eq!(reloaded.outputs(), genome.outputs());

    let inputs = vec![0.5; genome.inputs().len()];
    let outputs = genome.evaluate(&inputs).expect("input count matches");
    assert_eq!(outputs.len(), genome.outputs().len());
});
