//! tron benchmark

use bencher::{benchmark_group, benchmark_main, black_box, Bencher};
use tron::{encode, encode_with_vec, hash32, ArrayBuilder, Scalar, TronBuf, Value};

fn create_object() -> Value {
    // {key1: string, key2: 123, key3: true, key4: null, key5: [abc, false], key6: {key: true}}
    Value::from_iter([
        ("key1", Value::from("string")),
        ("key2", Value::Int64(123)),
        ("key3", Value::Bool(true)),
        ("key4", Value::Null),
        ("key5", Value::Array(vec![Value::from("abc"), Value::Bool(false)])),
        ("key6", Value::from_iter([("key", true)])),
    ])
}

fn create_wide_object() -> Value {
    Value::from_iter((0..1000).map(|i| (format!("key{}", i), Value::Int64(i))))
}

fn create_array() -> Value {
    Value::Array((0..1000).map(Value::Int64).collect())
}

fn bench_scalar_string(bench: &mut Bencher) {
    let mut bytes = Vec::with_capacity(1024);
    bench.iter(|| {
        bytes.clear();
        black_box(Scalar::string_with_vec("string", &mut bytes).unwrap());
    })
}

fn bench_scalar_int64(bench: &mut Bencher) {
    let mut bytes = Vec::with_capacity(1024);
    bench.iter(|| {
        bytes.clear();
        black_box(Scalar::int64_with_vec(123, &mut bytes).unwrap());
    })
}

fn bench_encode_object(bench: &mut Bencher) {
    let value = create_object();
    let mut bytes = Vec::with_capacity(1024);
    bench.iter(|| {
        bytes.clear();
        black_box(encode_with_vec(&value, &mut bytes).unwrap());
    })
}

fn bench_encode_wide_object(bench: &mut Bencher) {
    let value = create_wide_object();
    let mut bytes = Vec::with_capacity(64 * 1024);
    bench.iter(|| {
        bytes.clear();
        black_box(encode_with_vec(&value, &mut bytes).unwrap());
    })
}

fn bench_encode_array(bench: &mut Bencher) {
    let value = create_array();
    let mut bytes = Vec::with_capacity(64 * 1024);
    bench.iter(|| {
        bytes.clear();
        black_box(encode_with_vec(&value, &mut bytes).unwrap());
    })
}

fn bench_array_builder(bench: &mut Bencher) {
    bench.iter(|| {
        let mut builder = ArrayBuilder::try_new(1000).unwrap();
        for i in (0..1000).rev() {
            builder.push(i, i as i64).unwrap();
        }
        black_box(builder.finish().unwrap());
    })
}

fn bench_decode_object(bench: &mut Bencher) {
    let tron = encode(&create_object()).unwrap();
    bench.iter(|| black_box(tron.decode().unwrap()))
}

fn bench_decode_wide_object(bench: &mut Bencher) {
    let tron = encode(&create_wide_object()).unwrap();
    bench.iter(|| black_box(tron.decode().unwrap()))
}

fn bench_decode_array(bench: &mut Bencher) {
    let tron = encode(&create_array()).unwrap();
    bench.iter(|| black_box(tron.decode().unwrap()))
}

fn bench_hash32(bench: &mut Bencher) {
    bench.iter(|| black_box(hash32(black_box(b"some-object-key"), 0)))
}

fn bench_parse_json(bench: &mut Bencher) {
    let json = r#"{"key1": "string", "key2": 123, "key3": true, "key4": null, "key5": ["abc", false], "key6": {"key": "b64:AQID"}}"#;
    bench.iter(|| black_box(TronBuf::parse(json).unwrap()))
}

fn bench_format_json(bench: &mut Bencher) {
    let tron = encode(&create_object()).unwrap();
    bench.iter(|| black_box(tron.format(false).unwrap()))
}

benchmark_group!(
    tron_benches,
    bench_scalar_string,
    bench_scalar_int64,
    bench_encode_object,
    bench_encode_wide_object,
    bench_encode_array,
    bench_array_builder,
    bench_decode_object,
    bench_decode_wide_object,
    bench_decode_array,
    bench_hash32,
    bench_parse_json,
    bench_format_json,
);

benchmark_main!(tron_benches);
