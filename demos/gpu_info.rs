// demos/gpu_info.rs — report the selected compute device and tier.
//
//   cargo run --example gpu_info

use liftwave::{DeviceManager, PowerPreference};

fn main() {
    env_logger::init();

    for pref in [PowerPreference::HighPerformance, PowerPreference::LowPower] {
        let mut mgr = DeviceManager::new(pref, 0);
        match mgr.initialize() {
            Ok(()) => println!(
                "{pref:?}: {} (tier {})",
                mgr.adapter_name(),
                mgr.tier()
            ),
            Err(e) => println!("{pref:?}: {e}"),
        }
    }
}
