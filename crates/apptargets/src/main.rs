fn main() -> anyhow::Result<()> {
    apptargets::run()
}
