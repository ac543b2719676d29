use image::DynamicImage;

/// Convert image to a single 8-bit luminance channel
pub fn apply(image: DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageLuma8(_) => image,
        other => DynamicImage::ImageLuma8(other.to_luma8()),
    }
}
