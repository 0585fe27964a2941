use bitflags::bitflags;

bitflags! {
    /// Scene item classification.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct ItemKey: u8 {
        const SHAPE       = 1 << 0;
        const INVISIBLE   = 1 << 1;
        const TRANSPARENT = 1 << 2;
    }
}

bitflags! {
    /// Selects the shape pipeline a draw goes through.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct ShapeKey: u8 {
        const TRANSLUCENT  = 1 << 0;
        /// The item binds its own pipeline (ready procedural shader).
        const OWN_PIPELINE = 1 << 1;
        const MATERIAL     = 1 << 2;
        const TANGENTS     = 1 << 3;
        const LIGHTMAP     = 1 << 4;
        const UNLIT        = 1 << 5;
    }
}
