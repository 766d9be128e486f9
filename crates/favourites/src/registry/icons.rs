//! Icon bitmaps for favourites rows.
//!
//! On Linux, icons come from the current XDG icon theme: a file maps to an icon name
//! (`user-home`, `folder`, or a MIME-derived name like `text-plain`) and the theme lookup
//! finds the bitmap. Other platforms get no icon, which the sidebar renders as a blank cell.
//!
//! Themes mostly resolve to scalable SVGs, which `image` can't decode. For those, the
//! fixed-size PNG the theme ships for the same name is used instead, picked from
//! `<theme>/<N>x<N>/<context>/` or the `legacy` context.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Name of the icon used for the file system root.
pub(crate) const ROOT_ICON: &str = "drive-harddisk";
/// Name of the icon used for the user's home directory.
pub(crate) const HOME_ICON: &str = "user-home";
const FOLDER_ICON: &str = "folder";
const GENERIC_FILE_ICON: &str = "text-x-generic";

/// Fixed icon sizes themes commonly ship raster directories for.
const RASTER_SIZES: [u32; 10] = [16, 22, 24, 32, 48, 64, 96, 128, 256, 512];

/// An RGBA bitmap, ready to hand to a renderer.
#[derive(Clone, PartialEq)]
pub struct Icon {
    image: RgbaImage,
}

impl std::fmt::Debug for Icon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Icon")
            .field("width", &self.image.width())
            .field("height", &self.image.height())
            .finish()
    }
}

impl Icon {
    pub fn from_rgba(image: RgbaImage) -> Self {
        Self { image }
    }

    /// Loads an image file and scales it to fit within `size`×`size`.
    ///
    /// An SVG path is swapped for the theme's raster variant of the same icon. Returns
    /// `None` if there is none, or if the file can't be decoded.
    pub fn load(path: &Path, size: u32) -> Option<Self> {
        let raster;
        let path = if is_svg(path) {
            raster = raster_variant(path, size);
            match raster.as_deref() {
                Some(raster) => raster,
                None => {
                    log::debug!("Icons: no raster variant of {}", path.display());
                    return None;
                }
            }
        } else {
            path
        };
        match image::open(path) {
            Ok(img) => Some(Self::from_dynamic(img, size)),
            Err(e) => {
                log::debug!("Icons: can't decode {}: {}", path.display(), e);
                None
            }
        }
    }

    fn from_dynamic(img: DynamicImage, size: u32) -> Self {
        let scaled = if img.width() > size || img.height() > size {
            img.thumbnail(size, size)
        } else {
            img
        };
        Self {
            image: scaled.to_rgba8(),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_rgba(&self) -> &RgbaImage {
        &self.image
    }

    /// Encodes the icon as a `data:image/png;base64,...` URL for web front ends.
    pub fn to_data_url(&self) -> Result<String, image::ImageError> {
        let mut bytes = Cursor::new(Vec::new());
        self.image.write_to(&mut bytes, ImageFormat::Png)?;
        Ok(format!("data:image/png;base64,{}", STANDARD.encode(bytes.into_inner())))
    }
}

fn is_svg(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg") || ext.eq_ignore_ascii_case("svgz"))
}

/// Finds a PNG for the same icon in a fixed-size directory of the SVG's theme.
///
/// Expects the freedesktop layout `<theme>/<dir>/<context>/<name>.svg`. Sizes at or above
/// `size` are preferred, smallest first, then smaller ones, largest first.
fn raster_variant(svg: &Path, size: u32) -> Option<PathBuf> {
    let name = svg.file_stem()?;
    let context_dir = svg.parent()?;
    let context = context_dir.file_name()?;
    let theme_root = context_dir.parent()?.parent()?;

    let mut sizes = RASTER_SIZES.to_vec();
    sizes.sort_by_key(|&n| (n < size, n.abs_diff(size)));

    let mut file_name = name.to_os_string();
    file_name.push(".png");
    sizes
        .into_iter()
        .flat_map(|n| {
            let dir = theme_root.join(format!("{n}x{n}"));
            [dir.join(context).join(&file_name), dir.join("legacy").join(&file_name)]
        })
        .find(|candidate| candidate.is_file())
}

/// Picks the theme icon name for a file.
pub(crate) fn icon_name_for(path: &Path, is_directory: bool, home: Option<&Path>) -> String {
    if path == Path::new("/") {
        return ROOT_ICON.to_string();
    }
    if home.is_some_and(|h| h == path) {
        return HOME_ICON.to_string();
    }
    if is_directory {
        return FOLDER_ICON.to_string();
    }
    mime_icon_name(path)
}

#[cfg(target_os = "linux")]
fn mime_icon_name(path: &Path) -> String {
    mime_guess::from_path(path)
        .first()
        .map(|mime| mime.essence_str().replace('/', "-"))
        .unwrap_or_else(|| GENERIC_FILE_ICON.to_string())
}

#[cfg(not(target_os = "linux"))]
fn mime_icon_name(_path: &Path) -> String {
    GENERIC_FILE_ICON.to_string()
}

/// Finds the bitmap for `name` in the icon theme, falling back to the generic file icon.
#[cfg(target_os = "linux")]
pub(crate) fn lookup_theme_icon(name: &str, size: u32, theme: Option<&str>) -> Option<PathBuf> {
    let size = u16::try_from(size).unwrap_or(u16::MAX);
    let find = |icon: &str| {
        let builder = freedesktop_icons::lookup(icon).with_size(size).with_cache();
        match theme {
            Some(theme) => builder.with_theme(theme).find(),
            None => builder.find(),
        }
    };
    find(name).or_else(|| find(GENERIC_FILE_ICON))
}

#[cfg(not(target_os = "linux"))]
pub(crate) fn lookup_theme_icon(_name: &str, _size: u32, _theme: Option<&str>) -> Option<PathBuf> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_icon_name_for_root_and_home() {
        let home = Path::new("/home/alice");
        assert_eq!(icon_name_for(Path::new("/"), true, Some(home)), ROOT_ICON);
        assert_eq!(icon_name_for(home, true, Some(home)), HOME_ICON);
        assert_eq!(icon_name_for(Path::new("/home/alice/src"), true, Some(home)), "folder");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_icon_name_for_file_uses_mime_type() {
        assert_eq!(icon_name_for(Path::new("/tmp/notes.txt"), false, None), "text-plain");
        assert_eq!(icon_name_for(Path::new("/tmp/no_extension"), false, None), GENERIC_FILE_ICON);
    }

    #[test]
    fn test_large_image_is_scaled_down() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(64, 32, Rgba([255, 0, 0, 255])));
        let icon = Icon::from_dynamic(img, 32);
        assert_eq!(icon.width(), 32);
        assert_eq!(icon.height(), 16);
    }

    #[test]
    fn test_data_url_is_png() {
        let icon = Icon::from_rgba(RgbaImage::from_pixel(2, 2, Rgba([0, 0, 255, 255])));
        let url = icon.to_data_url().unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
        // PNG signature, base64-encoded
        assert!(url.contains("iVBORw0KGgo"));
    }

    #[test]
    fn test_load_missing_file_returns_none() {
        assert!(Icon::load(Path::new("/definitely/not/here.png"), 32).is_none());
    }

    #[test]
    fn test_load_png_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("icon.png");
        RgbaImage::from_pixel(48, 48, Rgba([1, 2, 3, 255])).save(&path).unwrap();

        let icon = Icon::load(&path, 32).unwrap();
        assert_eq!((icon.width(), icon.height()), (32, 32));
    }

    /// Lays out a freedesktop-style theme with a scalable SVG and the given PNG sizes.
    fn fake_theme(root: &Path, context: &str, png_sizes: &[u32]) -> PathBuf {
        let svg = root.join("scalable").join(context).join("user-home.svg");
        std::fs::create_dir_all(svg.parent().unwrap()).unwrap();
        std::fs::write(&svg, b"<svg xmlns=\"http://www.w3.org/2000/svg\"/>").unwrap();
        for &n in png_sizes {
            let dir = root.join(format!("{n}x{n}")).join(context);
            std::fs::create_dir_all(&dir).unwrap();
            RgbaImage::from_pixel(n, n, Rgba([9, 9, 9, 255]))
                .save(dir.join("user-home.png"))
                .unwrap();
        }
        svg
    }

    #[test]
    fn test_load_svg_uses_raster_variant_from_same_theme() {
        let theme = tempfile::tempdir().unwrap();
        let svg = fake_theme(theme.path(), "places", &[16, 48]);

        let icon = Icon::load(&svg, 32).unwrap();
        // 48 is the closest size at or above 32, scaled down
        assert_eq!((icon.width(), icon.height()), (32, 32));
    }

    #[test]
    fn test_raster_variant_prefers_larger_then_falls_back_to_smaller() {
        let theme = tempfile::tempdir().unwrap();
        let svg = fake_theme(theme.path(), "places", &[16, 24, 64]);
        assert_eq!(
            raster_variant(&svg, 32),
            Some(theme.path().join("64x64/places/user-home.png"))
        );
        assert_eq!(
            raster_variant(&svg, 128),
            Some(theme.path().join("64x64/places/user-home.png"))
        );
        assert_eq!(
            raster_variant(&svg, 20),
            Some(theme.path().join("24x24/places/user-home.png"))
        );
    }

    #[test]
    fn test_raster_variant_checks_legacy_context() {
        let theme = tempfile::tempdir().unwrap();
        let svg = fake_theme(theme.path(), "places", &[]);
        let legacy = theme.path().join("16x16/legacy");
        std::fs::create_dir_all(&legacy).unwrap();
        RgbaImage::from_pixel(16, 16, Rgba([0, 0, 0, 255]))
            .save(legacy.join("user-home.png"))
            .unwrap();

        let icon = Icon::load(&svg, 32).unwrap();
        assert_eq!((icon.width(), icon.height()), (16, 16));
    }

    #[test]
    fn test_load_svg_without_raster_variant_returns_none() {
        let theme = tempfile::tempdir().unwrap();
        let svg = fake_theme(theme.path(), "places", &[]);
        assert!(Icon::load(&svg, 32).is_none());
    }
}
