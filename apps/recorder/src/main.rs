fn main() -> anyhow::Result<()> {
    taperec_lib::run()
}
