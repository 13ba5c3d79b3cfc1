// ============================================================================
// IMAGE IO - load and store the pixel buffer (PNG, BMP, XPM)
// ============================================================================

use image::codecs::bmp::BmpEncoder;
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, ImageError, Rgba, RgbaImage};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Cursor, Write};
use std::path::Path;
use std::str::FromStr;

/// Formats the canvas can be saved as.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum SaveFormat {
    #[default]
    Png,
    Bmp,
    Xpm,
}

impl SaveFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            SaveFormat::Png => "png",
            SaveFormat::Bmp => "bmp",
            SaveFormat::Xpm => "xpm",
        }
    }

    pub fn all() -> &'static [SaveFormat] {
        &[SaveFormat::Png, SaveFormat::Bmp, SaveFormat::Xpm]
    }

    /// Infer the format from a path's extension.
    pub fn from_path(path: &Path) -> Option<SaveFormat> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|e| e.parse().ok())
    }
}

/// Case-insensitive: `"PNG"`, `"bmp"`, `"Xpm"`.
impl FromStr for SaveFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "png" => Ok(SaveFormat::Png),
            "bmp" => Ok(SaveFormat::Bmp),
            "xpm" => Ok(SaveFormat::Xpm),
            other => Err(format!("unsupported image format '{}'", other)),
        }
    }
}

#[derive(Debug)]
pub enum ImageIoError {
    Io(std::io::Error),
    Image(ImageError),
    Xpm(String),
    UnsupportedFormat(String),
}

impl std::fmt::Display for ImageIoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageIoError::Io(e) => write!(f, "I/O error: {}", e),
            ImageIoError::Image(e) => write!(f, "image codec error: {}", e),
            ImageIoError::Xpm(msg) => write!(f, "XPM error: {}", msg),
            ImageIoError::UnsupportedFormat(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ImageIoError {}

impl From<std::io::Error> for ImageIoError {
    fn from(e: std::io::Error) -> Self {
        ImageIoError::Io(e)
    }
}

impl From<ImageError> for ImageIoError {
    fn from(e: ImageError) -> Self {
        ImageIoError::Image(e)
    }
}

// ============================================================================
// LOAD
// ============================================================================

/// Read and decode an image file into RGBA.
pub fn load_image(path: &Path) -> Result<RgbaImage, ImageIoError> {
    let bytes = std::fs::read(path)?;
    decode_image(&bytes)
}

/// Decode image bytes into RGBA. XPM is detected by its header comment,
/// everything else is left to the `image` crate.
pub fn decode_image(bytes: &[u8]) -> Result<RgbaImage, ImageIoError> {
    if looks_like_xpm(bytes) {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| ImageIoError::Xpm(format!("not valid text: {}", e)))?;
        return decode_xpm(text);
    }
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

fn looks_like_xpm(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(64)];
    String::from_utf8_lossy(head).trim_start().starts_with("/* XPM */")
}

// ============================================================================
// SAVE
// ============================================================================

/// Encode `image` in memory.
pub fn encode_image(image: &RgbaImage, format: SaveFormat) -> Result<Vec<u8>, ImageIoError> {
    let mut out = Cursor::new(Vec::new());
    match format {
        SaveFormat::Png => {
            PngEncoder::new(&mut out).write_image(
                image.as_raw(),
                image.width(),
                image.height(),
                ColorType::Rgba8,
            )?;
        }
        SaveFormat::Bmp => {
            let mut encoder = BmpEncoder::new(&mut out);
            encoder.encode(
                image.as_raw(),
                image.width(),
                image.height(),
                ColorType::Rgba8,
            )?;
        }
        SaveFormat::Xpm => {
            out.write_all(encode_xpm(image, "image").as_bytes())?;
        }
    }
    Ok(out.into_inner())
}

/// Encode and write an image to a file.
pub fn encode_and_write(image: &RgbaImage, path: &Path, format: SaveFormat) -> Result<(), ImageIoError> {
    let bytes = encode_image(image, format)?;
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

// ============================================================================
// XPM (version 3) codec
// ============================================================================

/// Characters used for pixel codes; no quotes or backslashes.
const XPM_ALPHABET: &[u8; 64] =
    b".#abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Palette key: `None` for fully transparent pixels.
type XpmKey = Option<[u8; 3]>;

fn xpm_key(p: &Rgba<u8>) -> XpmKey {
    if p.0[3] == 0 { None } else { Some([p.0[0], p.0[1], p.0[2]]) }
}

/// Smallest characters-per-pixel able to index `colors` entries.
fn chars_per_pixel(colors: usize) -> usize {
    let mut cpp = 1;
    let mut capacity = XPM_ALPHABET.len();
    while capacity < colors {
        cpp += 1;
        capacity *= XPM_ALPHABET.len();
    }
    cpp
}

fn xpm_code(mut index: usize, cpp: usize) -> String {
    let mut code = vec![0u8; cpp];
    for slot in code.iter_mut().rev() {
        *slot = XPM_ALPHABET[index % XPM_ALPHABET.len()];
        index /= XPM_ALPHABET.len();
    }
    String::from_utf8_lossy(&code).into_owned()
}

/// Write `image` as an XPM3 C array named `name`.
pub fn encode_xpm(image: &RgbaImage, name: &str) -> String {
    let mut palette: Vec<XpmKey> = Vec::new();
    let mut lookup: HashMap<XpmKey, usize> = HashMap::new();
    for p in image.pixels() {
        let key = xpm_key(p);
        lookup.entry(key).or_insert_with(|| {
            palette.push(key);
            palette.len() - 1
        });
    }

    let cpp = chars_per_pixel(palette.len().max(1));
    let codes: Vec<String> = (0..palette.len()).map(|i| xpm_code(i, cpp)).collect();

    let mut out = String::new();
    out.push_str("/* XPM */\n");
    out.push_str(&format!("static char *{}[] = {{\n", name));
    out.push_str(&format!(
        "\"{} {} {} {}\",\n",
        image.width(),
        image.height(),
        palette.len(),
        cpp
    ));
    for (key, code) in palette.iter().zip(&codes) {
        match key {
            Some([r, g, b]) => out.push_str(&format!("\"{} c #{:02X}{:02X}{:02X}\",\n", code, r, g, b)),
            None => out.push_str(&format!("\"{} c None\",\n", code)),
        }
    }
    for (y, row) in image.rows().enumerate() {
        out.push('"');
        for p in row {
            out.push_str(&codes[lookup[&xpm_key(p)]]);
        }
        out.push('"');
        if y + 1 < image.height() as usize {
            out.push(',');
        }
        out.push('\n');
    }
    out.push_str("};\n");
    out
}

/// Pull the double-quoted strings out of an XPM file, skipping comments.
fn xpm_strings(text: &str) -> Result<Vec<&str>, ImageIoError> {
    let mut strings = Vec::new();
    let mut rest = text;
    loop {
        let next_comment = rest.find("/*");
        let next_quote = rest.find('"');
        match (next_comment, next_quote) {
            (Some(c), Some(q)) if c < q => {
                let end = rest[c + 2..]
                    .find("*/")
                    .ok_or_else(|| ImageIoError::Xpm("unterminated comment".into()))?;
                rest = &rest[c + 2 + end + 2..];
            }
            (_, Some(q)) => {
                let body = &rest[q + 1..];
                let end = body
                    .find('"')
                    .ok_or_else(|| ImageIoError::Xpm("unterminated string".into()))?;
                strings.push(&body[..end]);
                rest = &body[end + 1..];
            }
            (_, None) => break,
        }
    }
    Ok(strings)
}

fn parse_xpm_color(value: &str) -> Result<Rgba<u8>, ImageIoError> {
    let v = value.trim();
    if v.eq_ignore_ascii_case("none") {
        return Ok(Rgba([0, 0, 0, 0]));
    }
    if v.eq_ignore_ascii_case("black") {
        return Ok(Rgba([0, 0, 0, 255]));
    }
    if v.eq_ignore_ascii_case("white") {
        return Ok(Rgba([255, 255, 255, 255]));
    }
    let hex = v
        .strip_prefix('#')
        .ok_or_else(|| ImageIoError::Xpm(format!("unsupported color '{}'", v)))?;
    let digits = match hex.len() {
        3 => 1,
        6 => 2,
        12 => 4,
        _ => return Err(ImageIoError::Xpm(format!("bad hex color '{}'", v))),
    };
    let mut rgb = [0u8; 3];
    for (i, slot) in rgb.iter_mut().enumerate() {
        let part = hex
            .get(i * digits..(i + 1) * digits)
            .ok_or_else(|| ImageIoError::Xpm(format!("bad hex color '{}'", v)))?;
        let n = u16::from_str_radix(part, 16)
            .map_err(|_| ImageIoError::Xpm(format!("bad hex color '{}'", v)))?;
        *slot = match digits {
            1 => (n * 17) as u8,
            2 => n as u8,
            _ => (n >> 8) as u8,
        };
    }
    Ok(Rgba([rgb[0], rgb[1], rgb[2], 255]))
}

/// Decode XPM3 text.
pub fn decode_xpm(text: &str) -> Result<RgbaImage, ImageIoError> {
    let strings = xpm_strings(text)?;
    let header = strings
        .first()
        .ok_or_else(|| ImageIoError::Xpm("missing header".into()))?;
    let values: Vec<usize> = header
        .split_whitespace()
        .take(4)
        .map(|t| t.parse::<usize>())
        .collect::<Result<_, _>>()
        .map_err(|e| ImageIoError::Xpm(format!("bad header '{}': {}", header, e)))?;
    if values.len() < 4 {
        return Err(ImageIoError::Xpm(format!("bad header '{}'", header)));
    }
    let (w, h, ncolors, cpp) = (values[0], values[1], values[2], values[3]);
    if cpp == 0 {
        return Err(ImageIoError::Xpm("zero characters per pixel".into()));
    }
    let overflow = || ImageIoError::Xpm(format!("header '{}' is out of range", header));
    let pixels_start = ncolors.checked_add(1).ok_or_else(overflow)?;
    let pixels_end = pixels_start.checked_add(h).ok_or_else(overflow)?;
    if strings.len() < pixels_end {
        return Err(ImageIoError::Xpm("file ends early".into()));
    }
    let row_len = w.checked_mul(cpp).ok_or_else(overflow)?;
    let width = u32::try_from(w).map_err(|_| overflow())?;
    let height = u32::try_from(h).map_err(|_| overflow())?;

    let mut colors: HashMap<&str, Rgba<u8>> = HashMap::with_capacity(ncolors);
    for line in &strings[1..pixels_start] {
        let code = line
            .get(..cpp)
            .ok_or_else(|| ImageIoError::Xpm(format!("short color line '{}'", line)))?;
        let tokens: Vec<&str> = line[cpp..].split_whitespace().collect();
        let value = ["c", "g", "g4", "m"]
            .iter()
            .find_map(|key| {
                tokens
                    .iter()
                    .position(|t| t == key)
                    .and_then(|i| tokens.get(i + 1))
            })
            .ok_or_else(|| ImageIoError::Xpm(format!("no color in '{}'", line)))?;
        colors.insert(code, parse_xpm_color(value)?);
    }

    // Every row must be present and long enough before the image is allocated.
    let rows = &strings[pixels_start..pixels_end];
    if let Some(y) = rows.iter().position(|row| row.len() < row_len) {
        return Err(ImageIoError::Xpm(format!("row {} is too short", y)));
    }

    let mut img = RgbaImage::new(width, height);
    for (y, row) in rows.iter().enumerate() {
        for x in 0..w {
            let code = row
                .get(x * cpp..(x + 1) * cpp)
                .ok_or_else(|| ImageIoError::Xpm(format!("row {} is not ASCII", y)))?;
            let color = colors
                .get(code)
                .ok_or_else(|| ImageIoError::Xpm(format!("unknown pixel code '{}'", code)))?;
            img.put_pixel(x as u32, y as u32, *color);
        }
    }
    Ok(img)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RgbaImage {
        RgbaImage::from_fn(7, 5, |x, y| Rgba([(x * 30) as u8, (y * 50) as u8, 90, 255]))
    }

    #[test]
    fn format_parsing_is_case_insensitive() {
        assert_eq!("PNG".parse::<SaveFormat>(), Ok(SaveFormat::Png));
        assert_eq!("bmp".parse::<SaveFormat>(), Ok(SaveFormat::Bmp));
        assert_eq!(" Xpm ".parse::<SaveFormat>(), Ok(SaveFormat::Xpm));
        assert!("jpeg".parse::<SaveFormat>().is_err());
        assert_eq!(SaveFormat::from_path(Path::new("a/b.XPM")), Some(SaveFormat::Xpm));
        assert_eq!(SaveFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn png_and_bmp_decode_back() {
        let img = sample();
        for format in [SaveFormat::Png, SaveFormat::Bmp] {
            let bytes = encode_image(&img, format).expect("encode");
            let back = decode_image(&bytes).expect("decode");
            assert_eq!(back, img, "{:?}", format);
        }
    }

    #[test]
    fn xpm_round_trip() {
        let mut img = sample();
        img.put_pixel(0, 0, Rgba([1, 2, 3, 0]));
        let text = encode_xpm(&img, "canvas");
        assert!(text.starts_with("/* XPM */"));
        let back = decode_image(text.as_bytes()).expect("decode");
        assert_eq!(back.get_pixel(0, 0).0, [0, 0, 0, 0]);
        for (x, y, p) in img.enumerate_pixels().skip(1) {
            assert_eq!(back.get_pixel(x, y), p);
        }
    }

    #[test]
    fn xpm_widens_codes_for_many_colors() {
        assert_eq!(chars_per_pixel(1), 1);
        assert_eq!(chars_per_pixel(64), 1);
        assert_eq!(chars_per_pixel(65), 2);
        assert_eq!(chars_per_pixel(4097), 3);

        let img = RgbaImage::from_fn(20, 20, |x, y| Rgba([x as u8, y as u8, 0, 255]));
        let text = encode_xpm(&img, "many");
        assert!(text.contains("\"20 20 400 2\""));
        assert_eq!(decode_xpm(&text).expect("decode"), img);
    }

    #[test]
    fn xpm_reader_accepts_foreign_layout() {
        let text = r#"/* XPM */
/* a comment with "quotes" */
static char * tiny[] = {
"3 2 3 1 0 0",
"  c None",
"x c #F00",
"o s hilite c #00000000FFFF",
"x o",
"oxx"};
"#;
        let img = decode_xpm(text).expect("decode");
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(img.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(img.get_pixel(1, 0).0, [0, 0, 0, 0]);
        assert_eq!(img.get_pixel(0, 1).0, [0, 0, 255, 255]);
    }

    #[test]
    fn xpm_errors_are_reported() {
        assert!(matches!(decode_xpm("/* XPM */"), Err(ImageIoError::Xpm(_))));
        assert!(decode_xpm("/* XPM */ \"2 1 1 1\", \"a c #000000\", \"ab\"").is_err());
        assert!(decode_xpm("/* XPM */ \"1 1 1 1\", \"a c chartreuse\", \"a\"").is_err());
    }

    #[test]
    fn xpm_huge_header_values_are_rejected() {
        let too_many_colors = "/* XPM */ \"1 1 18446744073709551615 1\", \"a c #000000\", \"a\"";
        assert!(matches!(decode_xpm(too_many_colors), Err(ImageIoError::Xpm(_))));
        let too_wide = "/* XPM */ \"4611686018427387904 1 1 4\", \"abcd c #000000\", \"abcd\"";
        assert!(matches!(decode_xpm(too_wide), Err(ImageIoError::Xpm(_))));
        let too_tall = "/* XPM */ \"1 18446744073709551615 1 1\", \"a c #000000\", \"a\"";
        assert!(matches!(decode_xpm(too_tall), Err(ImageIoError::Xpm(_))));
        // Rows shorter than the header width are rejected before allocating.
        let short_rows = "/* XPM */ \"100000 2 1 1\", \"a c #000000\", \"a\", \"a\"";
        assert!(matches!(decode_xpm(short_rows), Err(ImageIoError::Xpm(_))));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        assert!(decode_image(b"definitely not an image").is_err());
    }
}
