#![no_main]
use libfuzzer_sys::fuzz_target;
use txprobe::ChannelConfig;

fuzz_target!(|data: &[u8]| {
    if let Ok(config) = ChannelConfig::decode(data) {
        assert_eq!(&config.encode()[..], data, "decoded records must re-encode unchanged");
    }
});
