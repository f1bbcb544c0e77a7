use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    simord::apps::run(std::env::args().skip(1))
}
