use std::sync::{Arc, mpsc::channel};

use termsink::{ColorMode, Level, Record, StdoutColorSink};

fn main() {
    let sink = Arc::new(StdoutColorSink::stdout(ColorMode::Automatic));
    sink.set_pattern("[%H:%M:%S.%e %n] [%^%l%$] %v");
    sink.write_record(&Record::new(Level::Info, "Hello, world!").with_name("main"))
        .unwrap();

    let (handles, senders): (Vec<_>, Vec<_>) = (0..5)
        .map(|i| {
            let (sender, receiver) = channel::<&'static str>();
            let sink = Arc::clone(&sink);
            (
                std::thread::spawn(move || {
                    let name = format!("thread {i}");
                    let level = Level::ALL[i % Level::COUNT];
                    for message in receiver {
                        let record = Record::new(level, format!("MESSAGE RECEIVED: {message}"))
                            .with_name(&name);
                        sink.write_record(&record).unwrap();
                    }
                }),
                sender,
            )
        })
        .unzip();
    for sender in senders {
        sender.send("Hello, world!").unwrap();
    }
    for handle in handles {
        handle.join().unwrap();
    }

    sink.set_color(Level::Info, "\x1b[35m");
    sink.write_record(&Record::new(Level::Info, "info is magenta now").with_name("main"))
        .unwrap();
    sink.flush().unwrap();
}
