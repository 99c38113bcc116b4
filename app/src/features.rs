attrdi::bitflags::bitflags! {
    /// Feature flags gating the demo's registrations
    ///
    /// Activated from `DIFeatureFlags:Features` in `appsettings.toml` or with
    /// `--feature` on the command line.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Features: u32 {
        const BETA = 1 << 0;
        const AUDIT = 1 << 1;
    }
}
