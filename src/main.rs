fn main() {
    if let Err(err) = lead_assembler_lib::run() {
        eprintln!("lead-assembler: {err:#}");
        std::process::exit(1);
    }
}
