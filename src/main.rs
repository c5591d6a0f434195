fn main() -> anyhow::Result<()> {
    aim_coach_lib::run()
}
