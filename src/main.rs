use hangar::world::{DisplayMode, WorldOptions, run};

fn main() -> anyhow::Result<()> {
    let vr = std::env::args().any(|arg| arg == "--vr");
    let options = WorldOptions {
        mode: if vr { DisplayMode::Vr } else { DisplayMode::Desktop },
    };
    run(options)
}
