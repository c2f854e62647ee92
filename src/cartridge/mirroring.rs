/// ## [Nametable mirroring](https://www.nesdev.org/wiki/Mirroring#Nametable_Mirroring)
///
/// The PPU addresses four 1KB nametables but the console only carries 2KB of
/// VRAM. The cartridge decides how the four logical tables share it:
///
/// ```text
/// Horizontal        Vertical          FourScreen
///  [ A ] [ a ]       [ A ] [ B ]       [ A ] [ B ]
///  [ B ] [ b ]       [ a ] [ b ]       [ C ] [ D ]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirroring {
  Vertical,
  Horizontal,
  FourScreen,
}
