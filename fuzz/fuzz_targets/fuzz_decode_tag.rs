#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Interpret the input as u16 register stream in big-endian pairs
    let regs: Vec<u16> = data
        .chunks_exact(2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .collect();

    // Assemble tag text the way the station stores it, two words per chunk
    let mut text = String::new();
    for pair in regs.chunks(2).take(5) {
        let value = wallwatch::registers::combine_registers(pair);
        text.push_str(&wallwatch::tag::chunk_to_ascii(value));
    }
    let tag = wallwatch::tag::RfidTag::from_text(text);
    assert!(tag.printable().is_ascii());

    if let Some(&first) = regs.first() {
        let _ = wallwatch::status::lookup(i64::from(first));
    }
});
