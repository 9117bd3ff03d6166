#![no_main]

use costscope::aggregate::SampleAggregator;
use costscope::capture::Capture;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Any input either decodes or yields an error; neither path may panic
    if let Ok(capture) = Capture::decode(data) {
        let _ = SampleAggregator::new().aggregate(&capture.samples());
    }
});
