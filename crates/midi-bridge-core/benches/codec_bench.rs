//! Criterion benchmarks for the MIDI bridge frame codec.
//!
//! The hot paths are the hardware callback (word → event → frame) and the
//! receiver loop (bytes → assembler → event → word).
//!
//! Run with:
//! ```bash
//! cargo bench --package midi-bridge-core --bench codec_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use midi_bridge_core::{encode_frame, FrameAssembler, MidiEvent};

fn bench_from_hardware_word(c: &mut Criterion) {
    let mut group = c.benchmark_group("from_hardware_word");
    for (name, word) in [
        ("note_on", 0x007F_3C90u32),
        ("program_change", 0x0000_05C3),
        ("clock", 0x0000_00F8),
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(name), &word, |b, w| {
            b.iter(|| encode_frame(MidiEvent::from_hardware_word(black_box(*w))))
        });
    }
    group.finish();
}

fn bench_assembler(c: &mut Criterion) {
    let bytes: Vec<u8> = (0..1024u32)
        .flat_map(|i| encode_frame(MidiEvent::new(0x90, (i % 128) as u8, 0x40, 0xFF)))
        .collect();

    let mut group = c.benchmark_group("assembler");
    for chunk in [1usize, 7, 1023] {
        group.bench_with_input(BenchmarkId::new("chunk", chunk), &chunk, |b, &chunk| {
            b.iter(|| {
                let mut asm = FrameAssembler::new();
                let mut words = 0u32;
                for piece in bytes.chunks(chunk) {
                    asm.extend(piece);
                    for ev in asm.drain_events() {
                        words = words.wrapping_add(ev.to_hardware_word());
                    }
                }
                black_box(words)
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_from_hardware_word, bench_assembler);
criterion_main!(benches);
