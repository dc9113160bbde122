use radial_gauge::{Color, Gauge, GaugeCommand, GaugeSpec};

use std::env;
use std::io::{self, BufRead};
use std::process;
use std::sync::mpsc;
use std::thread;

const USAGE: &str = "usage: radial-gauge [--range MIN MAX] [--title TITLE] \
[--line-count N] [--line-color #RRGGBB]";

fn main() {
    env_logger::init();

    let mut min_value = 0.0_f64;
    let mut max_value = 100.0_f64;
    let mut title = "Gauge".to_string();
    let mut line_count = None;
    let mut line_color = None;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--range" => {
                if let (Some(x), Some(y)) = (args.next(), args.next()) {
                    if let (Ok(x), Ok(y)) = (x.parse::<f64>(), y.parse::<f64>()) {
                        min_value = x.min(y);
                        max_value = x.max(y);
                    }
                }
            }
            "--title" => {
                if let Some(t) = args.next() {
                    title = t;
                }
            }
            "--line-count" => {
                if let Some(n) = args.next() {
                    match n.parse::<usize>() {
                        Ok(n) => line_count = Some(n),
                        Err(_) => {
                            eprintln!("--line-count expects an integer, got {n:?}");
                            process::exit(2);
                        }
                    }
                }
            }
            "--line-color" => {
                if let Some(hex) = args.next() {
                    match Color::from_hex(&hex) {
                        Some(color) => line_color = Some(color),
                        None => {
                            eprintln!("--line-color expects #RRGGBB, got {hex:?}");
                            process::exit(2);
                        }
                    }
                }
            }
            "--help" | "-h" => {
                println!("{USAGE}");
                return;
            }
            other => {
                eprintln!("unknown argument: {other}");
                eprintln!("{USAGE}");
                process::exit(2);
            }
        }
    }

    let mut spec = GaugeSpec::builder().title(title).build();
    if let Some(n) = line_count {
        spec.line_count = n;
    }
    if let Some(color) = line_color {
        spec.line_color = color;
    }

    let mut gauge = match Gauge::new(spec, min_value, max_value) {
        Ok(gauge) => gauge,
        Err(e) => {
            eprintln!("{e}");
            process::exit(2);
        }
    };

    // Feed positions from stdin; each line is a new value.
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match line.trim().parse::<f64>() {
                Ok(value) => {
                    if sender.send(GaugeCommand::SetPosition(value)).is_err() {
                        break;
                    }
                }
                Err(_) => log::warn!("ignoring non-numeric input line: {line:?}"),
            }
        }
    });

    if let Err(e) = gauge.show_with_commands(receiver) {
        eprintln!("gauge window failed: {e}");
        process::exit(1);
    }
}
