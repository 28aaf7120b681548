use std::time::Duration;

use geometry::{Extent, Point, Rect};
use sill::{
    event::Event, BackendKind, BlitDesc, Platform, PlatformDesc, SurfaceDesc, WindowDesc,
    WindowFeatures,
};

#[cfg(windows)]
const BACKEND: BackendKind = BackendKind::Win32;
#[cfg(not(windows))]
const BACKEND: BackendKind = BackendKind::Null;

const SURFACE_WIDTH: i32 = 320;
const SURFACE_HEIGHT: i32 = 240;

fn main() {
    env_logger::init();

    let mut platform = Platform::start(&PlatformDesc {
        backend: BACKEND,
        native_override: None,
    })
    .expect("platform failed to start");

    let mut window = platform
        .create_window(&WindowDesc {
            title: "Checkerboard",
            extent: Extent::new(640, 480),
            features: WindowFeatures::RESIZABLE,
            native_override: None,
        })
        .expect("window creation failed");

    let pixels = checkerboard_pixels();
    let desc = SurfaceDesc {
        extent: Extent::new(SURFACE_WIDTH, SURFACE_HEIGHT),
        pixels: &pixels,
    };
    // SAFETY: `pixels` outlives the surface; both are destroyed before main
    // returns.
    let mut surface =
        unsafe { platform.create_surface(&desc) }.expect("surface creation failed");

    let blit = BlitDesc {
        source: Rect::new(
            Point::new(0, 0),
            Extent::new(SURFACE_WIDTH, SURFACE_HEIGHT),
        ),
        destination: Rect::new(Point::new(0, 0), Extent::new(640, 480)),
    };

    let mut frames = 0u32;
    'running: loop {
        while let Some(event) = platform.poll_event() {
            match event {
                Event::Quit => break 'running,
                Event::WindowResized { extent, .. } => {
                    println!("resized to {}x{}", extent.width, extent.height);
                }
                Event::KeyDown { key, .. } => println!("key down: {key:?}"),
                _ => {}
            }
        }

        platform.blit_surface(&surface, &blit, &window);

        frames += 1;
        if BACKEND == BackendKind::Null && frames == 3 {
            // Nothing will ever ask a null platform to quit.
            break;
        }
        std::thread::sleep(Duration::from_millis(16));
    }

    platform.destroy_surface(&mut surface);
    platform.destroy_window(&mut window);
    platform.shutdown();
}

fn checkerboard_pixels() -> Vec<u8> {
    let mut pixels = vec![0u8; (SURFACE_WIDTH * SURFACE_HEIGHT * 4) as usize];

    for y in 0..SURFACE_HEIGHT {
        for x in 0..SURFACE_WIDTH {
            let offset = ((y * SURFACE_WIDTH + x) * 4) as usize;
            let lit = (x / 20 + y / 20) % 2 == 0;
            let value = if lit { 0xE0 } else { 0x20 };
            // BGRA
            pixels[offset] = value;
            pixels[offset + 1] = value;
            pixels[offset + 2] = value;
            pixels[offset + 3] = 0xFF;
        }
    }

    pixels
}
