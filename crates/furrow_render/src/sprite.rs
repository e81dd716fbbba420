use crate::texture::{Rect, Texture};

/// A pixel region of a texture.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Sprite {
    pub texture: Texture,
    pub region: Rect,
}

impl Sprite {
    pub fn new(texture: Texture, region: Rect) -> Self {
        Self { texture, region }
    }

    /// Sprite covering the whole texture.
    pub fn whole(texture: Texture) -> Self {
        Self::new(texture, texture.full_region())
    }
}

/// A sprite cut into a 3x3 grid. Corners keep their size; edges and the
/// middle tile to fill the requested area.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct NineSlicedSprite {
    pub top_left: Sprite,
    pub top_middle: Sprite,
    pub top_right: Sprite,
    pub middle_left: Sprite,
    pub middle: Sprite,
    pub middle_right: Sprite,
    pub bottom_left: Sprite,
    pub bottom_middle: Sprite,
    pub bottom_right: Sprite,
}

impl NineSlicedSprite {
    /// Slice `region` of `texture` with the given border widths in pixels.
    pub fn from_borders(
        texture: Texture,
        region: Rect,
        left: f32,
        top: f32,
        right: f32,
        bottom: f32,
    ) -> Self {
        let inner_w = region.width - left - right;
        let inner_h = region.height - top - bottom;
        let xs = [region.x, region.x + left, region.x + left + inner_w];
        let ys = [region.y, region.y + top, region.y + top + inner_h];
        let ws = [left, inner_w, right];
        let hs = [top, inner_h, bottom];
        let cell = |col: usize, row: usize| {
            Sprite::new(texture, Rect::new(xs[col], ys[row], ws[col], hs[row]))
        };

        Self {
            top_left: cell(0, 0),
            top_middle: cell(1, 0),
            top_right: cell(2, 0),
            middle_left: cell(0, 1),
            middle: cell(1, 1),
            middle_right: cell(2, 1),
            bottom_left: cell(0, 2),
            bottom_middle: cell(1, 2),
            bottom_right: cell(2, 2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::TextureHandle;

    #[test]
    fn borders_partition_the_region() {
        let texture = Texture::new(TextureHandle(3), 48, 48);
        let nine = NineSlicedSprite::from_borders(
            texture,
            Rect::new(0.0, 0.0, 48.0, 48.0),
            8.0,
            8.0,
            8.0,
            8.0,
        );
        assert_eq!(nine.middle.region, Rect::new(8.0, 8.0, 32.0, 32.0));
        assert_eq!(nine.bottom_right.region, Rect::new(40.0, 40.0, 8.0, 8.0));
        assert_eq!(nine.top_middle.region.width, 32.0);
    }
}
