use clap::Parser;
use mac154_cat::FrameParser;

// mac154-cat 40ebcdabffff0100010001000100003f1188061a0e0000000000011c0001c800011b00
// mac154-cat 61882bcdabefbe34126869
// mac154-cat 02002a

/// `cat`, but for IEEE 802.15.4 frames.
#[derive(Parser, Debug)]
#[command(version, about, long_about)]
struct Args {
    /// The hex-encoded IEEE 802.15.4 frame to dissect.
    #[clap(value_parser(clap::builder::NonEmptyStringValueParser::new()))]
    input: String,
}

fn main() {
    let args = Args::parse();

    match FrameParser::parse_hex(&args.input) {
        Ok(dissected) => println!("{}", dissected),
        Err(_) => {
            eprintln!("Failed to parse the frame.");
            std::process::exit(1);
        }
    }
}
