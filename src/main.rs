fn main() -> anyhow::Result<()> {
    sheepcat_lib::run()
}
