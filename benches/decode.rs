use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use wasmframe::parser::{self, encoding::*};

fn load_test_module(filename: &str) -> Vec<u8> {
    // Load a module from the JSON fixtures
    let json_content =
        std::fs::read_to_string("tests/fixtures/custom.json").expect("Failed to read fixtures");
    let test_data: serde_json::Value = serde_json::from_str(&json_content).expect("Failed to parse JSON");
    let binary = test_data["bin"][filename].as_str().expect("No such module in fixtures");
    base64::Engine::decode(&base64::engine::general_purpose::STANDARD, binary).expect("Failed to decode base64")
}

/// A module with one opaque code section of `code_size` bytes and a name
/// section naming `functions` functions.
fn synthetic_module(functions: u32, code_size: usize) -> Vec<u8> {
    let mut names = Vec::new();
    let mut map = Vec::new();
    write_vu32(&mut map, functions);
    for i in 0..functions {
        write_vu32(&mut map, i);
        write_name(&mut map, &format!("func_{}", i));
    }
    names.push(NAME_FUNCTIONS);
    write_vu32(&mut names, map.len() as u32);
    names.extend_from_slice(&map);

    let mut bytes = Vec::new();
    write_header(&mut bytes);
    write_section(&mut bytes, SECTION_CODE, &vec![0x0b; code_size]);
    write_custom_section(&mut bytes, "name", &names);
    bytes
}

fn benchmark_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    for (functions, code_size) in [(10u32, 1024usize), (1_000, 64 * 1024), (50_000, 1024 * 1024)].iter() {
        let bytes = synthetic_module(*functions, *code_size);
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::new("slice", functions), &bytes, |b, bytes| {
            b.iter(|| black_box(parser::decode_bytes(black_box(bytes)).expect("Failed to decode module")));
        });
        group.bench_with_input(BenchmarkId::new("stream", functions), &bytes, |b, bytes| {
            b.iter(|| black_box(parser::decode(black_box(&bytes[..])).expect("Failed to decode module")));
        });
    }
    group.finish();

    let fixture = load_test_module("name.wasm");
    c.bench_function("decode_name_fixture", |b| {
        b.iter(|| black_box(parser::decode_bytes(black_box(&fixture)).expect("Failed to decode module")));
    });
}

criterion_group!(benches, benchmark_decode);
criterion_main!(benches);
