use bitflags::bitflags;

bitflags! {
    /// Render-context capabilities that select a procedural pipeline variant.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
    pub struct ProceduralProgramKey: u8 {
        const TRANSPARENT = 1 << 0;
        const SKINNED     = 1 << 1;
        /// Dual-quaternion skinning. Implies `SKINNED`.
        const SKINNED_DQ  = 1 << 2;
    }
}

impl ProceduralProgramKey {
    #[must_use]
    pub fn new(transparent: bool, skinned: bool, dual_quat_skinned: bool) -> Self {
        let mut key = Self::empty();
        key.set(Self::TRANSPARENT, transparent);
        key.set(Self::SKINNED, skinned || dual_quat_skinned);
        key.set(Self::SKINNED_DQ, dual_quat_skinned);
        key
    }

    #[inline]
    #[must_use]
    pub fn is_transparent(self) -> bool {
        self.contains(Self::TRANSPARENT)
    }

    #[inline]
    #[must_use]
    pub fn is_skinned(self) -> bool {
        self.contains(Self::SKINNED)
    }

    #[inline]
    #[must_use]
    pub fn is_skinned_dq(self) -> bool {
        self.contains(Self::SKINNED_DQ)
    }
}
