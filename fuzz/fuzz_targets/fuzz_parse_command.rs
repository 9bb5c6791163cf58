#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(line) = std::str::from_utf8(data) else {
        return;
    };
    let command = txprobe::Command::parse(line);
    let _ = command.reply_warning();
    if let Some(wire) = command.to_wire() {
        assert_eq!(wire.last(), Some(&b'\n'));
    }
});
