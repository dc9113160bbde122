use radial_gauge::{Gauge, GaugeCommand, GaugeSpec};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use rand::Rng;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let spec = GaugeSpec::builder()
        .title("Live feed".to_string())
        .line_count(4)
        .build();
    let mut gauge = Gauge::new(spec, 0.0, 200.0)?;

    // Push a fresh position a few times a second from a background thread.
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let mut rng = rand::rng();
        loop {
            let value = rng.random_range(0.0..200.0);
            if sender.send(GaugeCommand::SetPosition(value)).is_err() {
                break;
            }
            thread::sleep(Duration::from_millis(250));
        }
    });

    println!("Showing a 0-200 dial with four intervals.");
    println!("Position updates arrive four times a second over a channel.");
    println!("Press Ctrl+C to exit");

    gauge.show_with_commands(receiver)
}
