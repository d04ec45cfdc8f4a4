use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use packet_bridge::protocol::versions::{ProtocolRange, V1_14_4, V1_8};
use packet_bridge::{BitSet, PacketSynthesizer, PendingFields, VersionGate, WireType};

fn tracker_fields(entity_id: i32) -> PendingFields {
    let mut fields = PendingFields::with_capacity(2);
    // push cannot fail for matching native types
    let _ = fields.push(WireType::VarInt, entity_id);
    let _ = fields.push(WireType::UnsignedByte, 255u8);
    fields
}

fn light_fields() -> PendingFields {
    let mask: BitSet = (0..18).step_by(2).collect();
    let mut fields = PendingFields::with_capacity(5);
    let _ = fields.push(WireType::VarInt, -4i32);
    let _ = fields.push(WireType::VarInt, 9i32);
    let _ = fields.push(WireType::Boolean, true);
    let _ = fields.push(WireType::BitSet, mask.clone());
    let _ = fields.push(WireType::BitSet, mask);
    fields
}

#[allow(clippy::unwrap_used)]
fn bench_synthesize(c: &mut Criterion) {
    let synthesizer = PacketSynthesizer::default();
    let mut group = c.benchmark_group("synthesize");

    group.bench_function("tracker_update", |b| {
        b.iter_batched(
            || tracker_fields(12_345),
            |fields| {
                synthesizer
                    .synthesize(fields, |buf| {
                        Ok((buf.read_var_int()?, buf.read_unsigned_byte()?))
                    })
                    .unwrap()
            },
            BatchSize::SmallInput,
        )
    });

    group.bench_function("light_update", |b| {
        b.iter_batched(
            light_fields,
            |fields| {
                synthesizer
                    .synthesize(fields, |buf| {
                        Ok((
                            buf.read_var_int()?,
                            buf.read_var_int()?,
                            buf.read_boolean()?,
                            buf.read_bit_set()?,
                            buf.read_bit_set()?,
                        ))
                    })
                    .unwrap()
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

#[allow(clippy::unwrap_used)]
fn bench_gate_dispatch(c: &mut Criterion) {
    let gate: VersionGate<i32, i32> = VersionGate::new();
    gate.register("mob_spawn", ProtocolRange::up_to(V1_14_4), |id| {
        tracker_fields(*id).commit(|buf| {
            let id = buf.read_var_int()?;
            buf.read_unsigned_byte()?;
            Ok(id)
        })
    })
    .unwrap();

    c.bench_function("gate_dispatch_hit", |b| {
        b.iter(|| gate.dispatch(V1_8, "mob_spawn", &7).unwrap())
    });
    c.bench_function("gate_dispatch_miss", |b| {
        b.iter(|| gate.dispatch(V1_8, "unknown", &7).unwrap())
    });
}

criterion_group!(benches, bench_synthesize, bench_gate_dispatch);
criterion_main!(benches);
